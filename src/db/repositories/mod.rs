mod collections;
mod plans;
mod sessions;
