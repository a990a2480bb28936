pub mod earn;
pub mod poller;
pub mod portfolio;
pub mod workflow;
