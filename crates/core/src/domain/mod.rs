pub mod approval;
pub mod notification;
pub mod offer;
pub mod slot;
