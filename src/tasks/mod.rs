mod sweeper;

pub use sweeper::SweepTask;
