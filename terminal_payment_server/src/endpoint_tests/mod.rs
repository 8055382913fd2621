mod devices;
mod helpers;
mod operator;
