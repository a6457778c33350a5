pub mod box_outline;
