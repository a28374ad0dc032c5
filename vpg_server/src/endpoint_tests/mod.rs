mod gateway;
mod helpers;
mod mocks;
mod payment_request;
