#[cfg(test)]
mod common;




#[cfg(test)]
mod verifier_test;
