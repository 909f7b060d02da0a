pub mod challenge_prizes;
pub mod monthly_credits;

#[cfg(test)]
pub(crate) mod test_support;
