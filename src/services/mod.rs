pub mod grouping;
pub mod merge_service;
pub mod merger;
pub mod ordering;
pub mod packager;
pub mod sweeper;
pub mod workspace;
