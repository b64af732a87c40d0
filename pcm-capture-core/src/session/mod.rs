pub mod capture_loop;
pub mod capture_session;
pub mod recorder;
pub mod stop_token;

#[cfg(test)]
pub(crate) mod test_support;
