use anyhow::anyhow;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, EventMask};
use x11rb::rust_connection::RustConnection;

use crate::core::error::FatalError;
use crate::ewmh::atoms::AtomCollection;

pub struct Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root_window: u32,
    pub atoms: AtomCollection,
    pub screen_width: u16,
    pub screen_height: u16,
}

impl Context {
    /// Connects to the display and claims substructure redirection on the
    /// root window. Exactly one client may hold that mask, so an Access error
    /// here means another window manager owns the display.
    pub fn new() -> Result<Self, FatalError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| FatalError::Connect(e.into()))?;
        let screen = &conn.setup().roots[screen_num];
        let root_window = screen.root;
        let screen_width = screen.width_in_pixels;
        let screen_height = screen.height_in_pixels;

        let atoms = AtomCollection::new(&conn)
            .map_err(|e| FatalError::Connect(e.into()))?
            .reply()
            .map_err(|e| FatalError::Connect(e.into()))?;

        let values = ChangeWindowAttributesAux::new()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY);
        let redirect = conn
            .change_window_attributes(root_window, &values)
            .map_err(|e| FatalError::Connect(e.into()))?;
        if redirect.check().is_err() {
            return Err(FatalError::WmDetected);
        }

        conn.flush()
            .map_err(|e| FatalError::Connect(anyhow!(e)))?;

        Ok(Self {
            conn,
            screen_num,
            root_window,
            atoms,
            screen_width,
            screen_height,
        })
    }
}
