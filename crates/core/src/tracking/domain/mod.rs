pub mod track_backend;
