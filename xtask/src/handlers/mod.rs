pub mod ci;
pub mod run;
pub mod testing;
