pub mod app;
pub mod builders;
pub mod db;

#[allow(unused_imports)]
pub use app::TestApp;
#[allow(unused_imports)]
pub use builders::{GroupBuilder, LocationBuilder, PersonBuilder, UserBuilder};
pub use db::TestDb;
