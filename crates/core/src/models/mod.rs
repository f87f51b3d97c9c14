pub mod instrument;
pub mod observation;
pub mod run;
pub mod settings;
