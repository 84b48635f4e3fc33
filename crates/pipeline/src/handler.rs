//! Which products a fileset yields, by geolocation record type.

use swath_catalog::RecordType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwathHandler {
    /// I-band SDR: calibrated raster, then NDVI from SVI01/SVI02.
    Imagery,
    /// M-band SDR: calibrated raster only.
    Moderate,
    /// Day/night band: calibrated raster only.
    DayNight,
    /// Recognized by the catalog, not processed (EDR, NCC).
    Unsupported,
}

impl SwathHandler {
    pub fn for_geolocation(record_type: RecordType) -> Self {
        match record_type {
            RecordType::Gitco | RecordType::Gimgo => SwathHandler::Imagery,
            RecordType::Gmtco | RecordType::Gmodo => SwathHandler::Moderate,
            RecordType::Gdnbo => SwathHandler::DayNight,
            RecordType::Gigto
            | RecordType::Gmgto
            | RecordType::Gncco
            | RecordType::IBandSdr(_)
            | RecordType::MBandSdr(_)
            | RecordType::IBandEdr(_)
            | RecordType::MBandEdr(_)
            | RecordType::DayNightSdr
            | RecordType::NccEdr => SwathHandler::Unsupported,
        }
    }

    pub fn produces_raster(&self) -> bool {
        !matches!(self, SwathHandler::Unsupported)
    }

    pub fn produces_ndvi(&self) -> bool {
        matches!(self, SwathHandler::Imagery)
    }
}
