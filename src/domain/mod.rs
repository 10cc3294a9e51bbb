mod address_record;
mod coordinate;
mod fix;
mod position;

pub use address_record::AddressRecord;
pub use coordinate::{Coordinate, CoordinateError};
pub use fix::{Fix, Priority, ProviderId};
pub use position::{CachedPosition, Position, PositionSource};
