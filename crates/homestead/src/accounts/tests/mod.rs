mod routing;
mod verification;
