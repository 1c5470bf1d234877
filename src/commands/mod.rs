pub mod add_gateway;
pub mod link_customer;
pub mod migrate;
pub mod serve;

pub use add_gateway::handle_add_gateway;
pub use link_customer::handle_link_customer;
pub use migrate::handle_migrate;
pub use serve::handle_serve;
