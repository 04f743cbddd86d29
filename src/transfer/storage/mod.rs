// Destination storage backends

mod drive;
mod traits;

pub use drive::DriveStorage;
pub use traits::DestinationStorage;
