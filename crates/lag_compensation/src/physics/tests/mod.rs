//! End-to-end scenarios and randomized properties for the rewind world

mod scenarios;
