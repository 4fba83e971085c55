#[cfg(test)]
mod matcher_tests;
#[cfg(test)]
mod module_tests;
