pub mod cloud_app;
pub mod module_deployment;
pub mod observability;
