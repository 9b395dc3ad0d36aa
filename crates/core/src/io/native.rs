//! GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Supports single-band, north-up GeoTIFFs: ModelPixelScale + ModelTiepoint
//! georeferencing, the EPSG code from the GeoKey directory and the
//! GDAL_NODATA tag. Invalid cells are written as NaN with a `nan` GDAL_NODATA.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype::Gray32Float;
use tiff::tags::Tag;

const GT_MODEL_TYPE_KEY: u32 = 1024;
const GT_RASTER_TYPE_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    // Values that do not fit T (e.g. NaN into u16) become invalid cells
    let (data, fits): (Vec<T>, Vec<bool>) = match result {
        DecodingResult::F32(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::F64(buf) => cast_all(buf.iter().copied()),
        DecodingResult::U8(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::U16(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::U32(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::I8(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::I16(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        DecodingResult::I32(buf) => cast_all(buf.iter().map(|&v| v as f64)),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ));
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    for (i, ok) in fits.iter().enumerate() {
        if !ok {
            raster.set_invalid(i / cols, i % cols);
        }
    }

    match read_geotransform(&mut decoder)? {
        Some(transform) => raster.set_transform(transform),
        None => tracing::warn!(
            rows,
            cols,
            "no ModelPixelScale/ModelTiepoint tags; using the identity transform"
        ),
    }
    raster.set_crs(read_crs(&mut decoder));

    if let Some(nodata) = read_nodata(&mut decoder)? {
        raster.set_nodata(T::from_f64(nodata));
    }
    raster.mask_nodata();

    Ok(raster)
}

fn cast_all<T, I>(values: I) -> (Vec<T>, Vec<bool>)
where
    T: RasterElement,
    I: Iterator<Item = f64>,
{
    values
        .map(|v| match T::from_f64(v) {
            Some(t) => (t, true),
            None => (T::zero(), false),
        })
        .unzip()
}

fn tag_error(tag: Tag, e: tiff::TiffError) -> Error {
    Error::Other(format!("Malformed {:?}: {}", tag, e))
}

/// GeoTransform from ModelPixelScale + ModelTiepoint.
///
/// `None` when either tag is absent; an error when present but unusable.
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<Option<GeoTransform>> {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .map_err(|e| tag_error(Tag::ModelPixelScaleTag, e))?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .map_err(|e| tag_error(Tag::ModelTiepointTag, e))?;
    let (Some(scale), Some(tiepoint)) = (scale, tiepoint) else {
        return Ok(None);
    };

    let scale = scale
        .into_f64_vec()
        .map_err(|e| tag_error(Tag::ModelPixelScaleTag, e))?;
    let tiepoint = tiepoint
        .into_f64_vec()
        .map_err(|e| tag_error(Tag::ModelTiepointTag, e))?;

    if scale.len() < 2 || tiepoint.len() < 6 || scale[0] <= 0.0 || scale[1] <= 0.0 {
        return Err(Error::Other(format!(
            "Cannot determine geotransform from pixel scale {:?} and tiepoint {:?}",
            scale, tiepoint
        )));
    }

    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])))
}

/// EPSG code from the GeoKey directory, if one is declared inline
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u32_vec(Tag::GeoKeyDirectoryTag).ok()?;
    // header: version, revision, minor, key count; then 4 shorts per key
    let count = *keys.get(3)? as usize;
    let crs = keys
        .get(4..4 + count * 4)?
        .chunks_exact(4)
        .find(|k| {
            (k[0] == PROJECTED_CS_TYPE_KEY || k[0] == GEOGRAPHIC_TYPE_KEY) && k[1] == 0 && k[3] != 32767
        })
        .map(|k| CRS::from_epsg(k[3]));
    if crs.is_none() {
        tracing::debug!("GeoKey directory declares no inline EPSG code");
    }
    crs
}

/// GDAL_NODATA value; the tag is ASCII and may carry a trailing NUL
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Option<f64>> {
    let Some(value) = decoder
        .find_tag(Tag::GdalNodata)
        .map_err(|e| tag_error(Tag::GdalNodata, e))?
    else {
        return Ok(None);
    };
    let text = value
        .into_string()
        .map_err(|e| tag_error(Tag::GdalNodata, e))?;
    let text = text.trim_matches(char::from(0)).trim();
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| Error::Other(format!("Malformed GDAL_NODATA value {:?}", text)))
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, BufWriter::new(file))
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .indexed_iter()
        .map(|((r, c), &v)| {
            if raster.is_valid(r, c) {
                num_traits::cast(v).unwrap_or(f32::NAN)
            } else {
                f32::NAN
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let geokeys = geo_key_directory(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .encoder()
        .write_tag(Tag::GdalNodata, "nan")
        .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

/// Minimal GeoKey directory: model type, raster type (PixelIsArea) and the
/// EPSG code when known.
fn geo_key_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| u16::try_from(c.epsg()).ok());
    let geographic = crs.is_some_and(|c| c.is_geographic());
    let model_type: u16 = if geographic { 2 } else { 1 };

    let mut keys: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY as u16, 0, 1, model_type],
        [GT_RASTER_TYPE_KEY as u16, 0, 1, 1],
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        keys.push([key as u16, 0, 1, code]);
    }

    let mut out = vec![1, 1, 0, keys.len() as u16];
    out.extend(keys.into_iter().flatten());
    out
}
