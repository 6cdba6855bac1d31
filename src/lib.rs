pub mod app;
pub mod config;
pub mod error;
pub mod api {
    pub mod auth;
    pub mod consultations;
    pub mod content;
    pub mod errors;
    pub mod images;
    pub mod instructors;
    pub mod records;
    pub mod response;
}
pub mod auth {
    pub mod jwt;
    pub mod middleware;
    pub mod models;
    pub mod password;
}
pub mod db {
    pub mod admin_repository;
    pub mod consultation_repository;
    pub mod content_repository;
    pub mod instructor_repository;
    pub mod records;
}
pub mod models {
    pub mod admin;
    pub mod bson_serde;
    pub mod consultation;
    pub mod content;
    pub mod entity;
    pub mod instructor;
    pub mod posts;
}
pub mod services {
    pub mod consultations;
    pub mod content;
    pub mod images;
    pub mod ordering;
    pub mod records;
}
pub mod storage {
    pub mod client;
}

#[cfg(test)]
mod testing;
