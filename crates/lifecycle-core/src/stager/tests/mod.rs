// Stager test module
#[cfg(test)]
mod common;
