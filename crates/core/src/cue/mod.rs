pub mod cue;
pub mod cue_key;
pub mod cue_table;
pub mod validation;
