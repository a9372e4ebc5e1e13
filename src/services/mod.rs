pub mod event_sink;
pub mod file_intake;
pub mod health_monitor;
pub mod inference_client;
pub mod progress_simulator;
pub mod request_controller;
pub mod result_renderer;
pub mod scheduler;
pub mod thumbnail_service;
