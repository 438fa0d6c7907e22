pub mod preferences;

pub use preferences::UserStore;
