pub mod preprocessing;
pub mod segmentation;
pub mod morphology;
pub mod extraction;
pub mod overlay;

pub use preprocessing::*;
pub use segmentation::*;
pub use morphology::*;
pub use extraction::*;
pub use overlay::*;
