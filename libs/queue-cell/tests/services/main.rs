
mod delay_test;
mod resequence_test;
mod token_test;
