pub mod database;
pub mod helpers;
pub mod test_app;

#[allow(unused_imports)]
pub use database::TestDb;
#[allow(unused_imports)]
pub use helpers::{create_admin_token, json_body, login, register_and_login, token_for};
#[allow(unused_imports)]
pub use test_app::{TestApp, TestAppOptions};
