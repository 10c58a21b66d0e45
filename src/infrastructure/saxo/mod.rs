pub mod callback;
pub mod client;
pub mod oauth;

/// Saxo environment: simulation accounts or live trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaxoEnvironment {
    #[default]
    Simulation,
    Live,
}

impl SaxoEnvironment {
    pub fn from_production_flag(production: bool) -> Self {
        if production {
            SaxoEnvironment::Live
        } else {
            SaxoEnvironment::Simulation
        }
    }

    pub fn gateway_url(&self) -> &'static str {
        match self {
            SaxoEnvironment::Simulation => "https://gateway.saxobank.com/sim/openapi",
            SaxoEnvironment::Live => "https://gateway.saxobank.com/openapi",
        }
    }

    pub fn authorize_url(&self) -> &'static str {
        match self {
            SaxoEnvironment::Simulation => "https://sim.logonvalidation.net/authorize",
            SaxoEnvironment::Live => "https://live.logonvalidation.net/authorize",
        }
    }

    pub fn token_url(&self) -> &'static str {
        match self {
            SaxoEnvironment::Simulation => "https://sim.logonvalidation.net/token",
            SaxoEnvironment::Live => "https://live.logonvalidation.net/token",
        }
    }
}
