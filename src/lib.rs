pub mod playback;
pub mod player;
pub mod repository;
pub mod resolver;
pub mod shared;
pub mod source;

pub mod prelude {
    pub use crate::playback::{Clock, FrameScheduler, PlaybackConfig, PlaybackState, Tick};
    pub use crate::player::{DaySummary, Frame, Player, TripHighlight};
    pub use crate::repository::{Day, SharedDay, Station, StationId, StationSnapshot, Trip};
    pub use crate::resolver::{
        ActiveTripView, Diff, ResolverStrategy, StationDisplayState, StationReading,
    };
    pub use crate::shared::{Coordinate, Minute};
    pub use crate::source::{DataSource, LoadReport};
}
