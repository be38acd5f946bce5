mod id_generator_nanoid;
mod token_codec_jwt;
mod token_service_impl;

pub use id_generator_nanoid::*;
pub use token_codec_jwt::*;
pub use token_service_impl::*;
