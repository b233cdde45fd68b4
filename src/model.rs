pub mod versioned;

pub mod perm;
pub mod triangulation;
pub mod polynomial;
pub mod link;
pub mod surfaces;

pub mod packet;

pub mod codec;
pub mod progress;
pub mod preferences;
