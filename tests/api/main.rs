mod health_check;
mod helpers;
mod pdf;
mod submissions;
mod users;
