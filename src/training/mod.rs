pub mod dataset;
pub mod encoder;
pub mod split;
pub mod trainer;

pub use dataset::{DatasetError, read_dataset, write_dataset};
pub use encoder::{EncoderError, LabelEncoder};
pub use split::{HoldoutSplit, train_test_split};
pub use trainer::{TrainOptions, TrainingReport, train};
