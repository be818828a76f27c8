pub mod competitors;
pub mod history;
pub mod rankings;
