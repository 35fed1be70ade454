pub mod area;
pub mod house;
pub mod invitation;
pub mod passage_log;
pub mod record;
pub mod user;
pub mod vehicle;
pub mod visitor;

pub use area::{Area, NewArea};
pub use house::{House, NewHouse};
pub use invitation::{Invitation, NewInvitation};
pub use passage_log::{NewPassageLog, PassageLog, PassageType, VerificationMethod};
pub use record::{relation_ids, ListResult, Record, RecordMeta};
pub use user::{User, UserRole};
pub use vehicle::{NewVehicle, Vehicle, VehicleAccessEvent, VehicleTier};
pub use visitor::{NewVisitor, Visitor};
