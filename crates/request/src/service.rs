//! Card services bound to matched cards

use crate::error::RequestError;

/// Creates the service a request hands back for a matched card
pub trait CardServiceFactory<C> {
    /// Service bound to a connection
    type Service;

    /// Whether the services created by this factory support `kind`
    fn supports(&self, kind: &str) -> bool;

    /// Bind a service to the connection of a matched card
    fn bind(&self, connection: C) -> Result<Self::Service, RequestError>;
}

/// Service that passes the connection through untouched
#[derive(Debug)]
pub struct PassThruCardService<C> {
    connection: C,
}

impl<C> PassThruCardService<C> {
    /// Bind to `connection`
    pub const fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Connection to the card
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutable access to the connection
    pub const fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Take the connection back
    pub fn into_connection(self) -> C {
        self.connection
    }
}

/// Factory for [`PassThruCardService`], supports every service kind
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThruCardServiceFactory;

impl<C> CardServiceFactory<C> for PassThruCardServiceFactory {
    type Service = PassThruCardService<C>;

    fn supports(&self, _kind: &str) -> bool {
        true
    }

    fn bind(&self, connection: C) -> Result<Self::Service, RequestError> {
        Ok(PassThruCardService::new(connection))
    }
}
