pub mod pipeline_service;
