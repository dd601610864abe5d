pub mod access_token;
pub mod audit_log;
pub mod job_execution;
pub mod license_application;
pub mod location;
pub mod office;
pub mod person;
pub mod region;
pub mod user;
pub mod user_group;
pub mod user_location_assignment;

pub use access_token::Entity as AccessToken;
pub use audit_log::Entity as AuditLog;
pub use job_execution::Entity as JobExecution;
pub use license_application::Entity as LicenseApplication;
pub use location::Entity as Location;
pub use office::Entity as Office;
pub use person::Entity as Person;
pub use region::Entity as Region;
pub use user::Entity as User;
pub use user_group::Entity as UserGroup;
pub use user_location_assignment::Entity as UserLocationAssignment;
