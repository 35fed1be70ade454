//! Typed access to each collection.
//!
//! Payloads are validated before anything is sent.

mod access_events;
mod areas;
mod dashboard;
mod houses;
mod invitations;
mod passage_logs;
mod users;
mod vehicles;
mod visitors;

pub use access_events::AccessEventRepository;
pub use areas::AreaRepository;
pub use dashboard::{Dashboard, DashboardSummary};
pub use houses::HouseRepository;
pub use invitations::InvitationRepository;
pub use passage_logs::PassageLogRepository;
pub use users::UserRepository;
pub use vehicles::VehicleRepository;
pub use visitors::VisitorRepository;
