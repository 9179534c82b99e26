mod clock;
mod transfer;
