pub mod scenario;
pub mod util;

pub use util::{load_policy, parse_day_arg, parse_seeds, split_csv};
