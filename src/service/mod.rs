pub mod attendance;
pub mod directory;
pub mod helpdesk;
pub mod ledger;
pub mod overlap;
