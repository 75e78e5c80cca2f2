// Quality scoring: the rule catalog and the scorer that turns detected
// violations into category, section and overall scores.

pub mod rules;
pub mod scorer;
