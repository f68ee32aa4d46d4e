//! Chunk and track identifiers.

use crate::animation::TrackKind;

pub const MDLX: [u8; 4] = *b"MDLX";

pub const VERS: [u8; 4] = *b"VERS";
pub const MODL: [u8; 4] = *b"MODL";
pub const SEQS: [u8; 4] = *b"SEQS";
pub const GLBS: [u8; 4] = *b"GLBS";
pub const TEXS: [u8; 4] = *b"TEXS";
pub const MTLS: [u8; 4] = *b"MTLS";
pub const GEOS: [u8; 4] = *b"GEOS";
pub const GEOA: [u8; 4] = *b"GEOA";
pub const BONE: [u8; 4] = *b"BONE";
pub const LITE: [u8; 4] = *b"LITE";
pub const HELP: [u8; 4] = *b"HELP";
pub const ATCH: [u8; 4] = *b"ATCH";
pub const PIVT: [u8; 4] = *b"PIVT";
pub const PREM: [u8; 4] = *b"PREM";
pub const PRE2: [u8; 4] = *b"PRE2";
pub const RIBB: [u8; 4] = *b"RIBB";
pub const EVTS: [u8; 4] = *b"EVTS";
pub const CLID: [u8; 4] = *b"CLID";
pub const BPOS: [u8; 4] = *b"BPOS";

/// Chunks we recognise but do not model
pub const IGNORED: [[u8; 4]; 6] = [*b"TXAN", *b"CAMS", *b"CORN", *b"FAFX", *b"TXST", *b"INFO"];

// Inside MTLS
pub const LAYS: [u8; 4] = *b"LAYS";

// Inside GEOS
pub const VRTX: [u8; 4] = *b"VRTX";
pub const NRMS: [u8; 4] = *b"NRMS";
pub const PTYP: [u8; 4] = *b"PTYP";
pub const PCNT: [u8; 4] = *b"PCNT";
pub const PVTX: [u8; 4] = *b"PVTX";
pub const GNDX: [u8; 4] = *b"GNDX";
pub const MTGC: [u8; 4] = *b"MTGC";
pub const MATS: [u8; 4] = *b"MATS";
pub const TANG: [u8; 4] = *b"TANG";
pub const SKIN: [u8; 4] = *b"SKIN";
pub const UVAS: [u8; 4] = *b"UVAS";
pub const UVBS: [u8; 4] = *b"UVBS";

// Inside EVTS
pub const KEVT: [u8; 4] = *b"KEVT";

// Tracks
pub const KGTR: [u8; 4] = *b"KGTR";
pub const KGRT: [u8; 4] = *b"KGRT";
pub const KGSC: [u8; 4] = *b"KGSC";
pub const KMTA: [u8; 4] = *b"KMTA";
pub const KMTF: [u8; 4] = *b"KMTF";
pub const KGAO: [u8; 4] = *b"KGAO";
pub const KGAC: [u8; 4] = *b"KGAC";
pub const KATV: [u8; 4] = *b"KATV";
pub const KLAS: [u8; 4] = *b"KLAS";
pub const KLAE: [u8; 4] = *b"KLAE";
pub const KLAC: [u8; 4] = *b"KLAC";
pub const KLAI: [u8; 4] = *b"KLAI";
pub const KLBC: [u8; 4] = *b"KLBC";
pub const KLBI: [u8; 4] = *b"KLBI";
pub const KLAV: [u8; 4] = *b"KLAV";
pub const KPEE: [u8; 4] = *b"KPEE";
pub const KPEG: [u8; 4] = *b"KPEG";
pub const KPLN: [u8; 4] = *b"KPLN";
pub const KPLT: [u8; 4] = *b"KPLT";
pub const KPEL: [u8; 4] = *b"KPEL";
pub const KPES: [u8; 4] = *b"KPES";
pub const KPEV: [u8; 4] = *b"KPEV";
pub const KP2S: [u8; 4] = *b"KP2S";
pub const KP2R: [u8; 4] = *b"KP2R";
pub const KP2L: [u8; 4] = *b"KP2L";
pub const KP2G: [u8; 4] = *b"KP2G";
pub const KP2E: [u8; 4] = *b"KP2E";
pub const KP2N: [u8; 4] = *b"KP2N";
pub const KP2W: [u8; 4] = *b"KP2W";
pub const KP2V: [u8; 4] = *b"KP2V";
pub const KRHA: [u8; 4] = *b"KRHA";
pub const KRHB: [u8; 4] = *b"KRHB";
pub const KRAL: [u8; 4] = *b"KRAL";
pub const KRCO: [u8; 4] = *b"KRCO";
pub const KRTX: [u8; 4] = *b"KRTX";
pub const KRVS: [u8; 4] = *b"KRVS";

// Layer tracks read and discarded: emissive gain (v900+) and the
// fresnel color, alpha and team color tracks (v1000)
pub const KMTE: [u8; 4] = *b"KMTE";
pub const KFC3: [u8; 4] = *b"KFC3";
pub const KFCA: [u8; 4] = *b"KFCA";
pub const KFTC: [u8; 4] = *b"KFTC";

/// Value kind carried by a track tag, or `None` for a tag that is not a track.
pub fn track_kind(tag: &[u8; 4]) -> Option<TrackKind> {
    Some(match tag {
        &KGTR => TrackKind::Translation,
        &KGRT => TrackKind::Rotation,
        &KGSC => TrackKind::Scaling,
        &KGAC | &KLAC | &KLBC | &KRCO | &KFC3 => TrackKind::Color,
        &KMTF | &KRTX => TrackKind::Integer,
        &KMTA | &KGAO | &KATV | &KLAS | &KLAE | &KLAI | &KLBI | &KLAV | &KPEE | &KPEG
        | &KPLN | &KPLT | &KPEL | &KPES | &KPEV | &KP2S | &KP2R | &KP2L | &KP2G | &KP2E
        | &KP2N | &KP2W | &KP2V | &KRHA | &KRHB | &KRAL | &KRVS | &KMTE | &KFCA | &KFTC => {
            TrackKind::Scalar
        }
        _ => return None,
    })
}
