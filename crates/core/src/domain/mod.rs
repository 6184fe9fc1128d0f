pub mod order;
pub mod price;
pub mod tool;
pub mod verdict;
