pub mod quiz_dto;
pub mod response;
