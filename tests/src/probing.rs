mod limits;
mod scenarios;
