mod archive;
mod batch;
mod checks;
mod config;
mod publish;
mod run;
mod scan;

pub use batch::next_batch_name;
pub use run::run;
pub use scan::count_tree;
