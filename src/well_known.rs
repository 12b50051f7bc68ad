// Well-known auxiliary schema files and dependency assembly
//
// Dataset types may refer to google.protobuf.Duration, google.protobuf.Timestamp
// and the datasets.v1 well-known types. These three files are fixed, so they are
// bundled instead of fetched.

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileOptions,
};

pub const DURATION_FILE: &str = "google/protobuf/duration.proto";
pub const TIMESTAMP_FILE: &str = "google/protobuf/timestamp.proto";
pub const WELL_KNOWN_TYPES_FILE: &str = "datasets/v1/well_known_types.proto";

/// Package of the dataset well-known types.
pub const WELL_KNOWN_TYPES_PACKAGE: &str = "datasets.v1";

/// The descriptor set submitted for generation: the three well-known files
/// followed by `file`, in that order.
pub fn assemble(file: FileDescriptorProto) -> Vec<FileDescriptorProto> {
    vec![duration(), timestamp(), well_known_types(), file]
}

/// `google/protobuf/duration.proto`
pub fn duration() -> FileDescriptorProto {
    google_file(DURATION_FILE, "Duration", "durationpb")
}

/// `google/protobuf/timestamp.proto`
pub fn timestamp() -> FileDescriptorProto {
    google_file(TIMESTAMP_FILE, "Timestamp", "timestamppb")
}

// Duration and Timestamp share their shape: int64 seconds, int32 nanos.
fn google_file(name: &str, message_name: &str, go_package: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some("google.protobuf".to_string()),
        message_type: vec![message(
            message_name,
            vec![field("seconds", 1, Type::Int64), field("nanos", 2, Type::Int32)],
        )],
        options: Some(FileOptions {
            java_package: Some("com.google.protobuf".to_string()),
            go_package: Some(format!("google.golang.org/protobuf/types/known/{go_package}")),
            ..Default::default()
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// `datasets/v1/well_known_types.proto`
pub fn well_known_types() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(WELL_KNOWN_TYPES_FILE.to_string()),
        package: Some(WELL_KNOWN_TYPES_PACKAGE.to_string()),
        message_type: vec![
            message("UUID", vec![field("uuid", 1, Type::Bytes)]),
            message(
                "Vec3",
                vec![field("x", 1, Type::Double), field("y", 2, Type::Double), field("z", 3, Type::Double)],
            ),
            message(
                "Quaternion",
                vec![
                    field("q1", 1, Type::Double),
                    field("q2", 2, Type::Double),
                    field("q3", 3, Type::Double),
                    field("q4", 4, Type::Double),
                ],
            ),
            message(
                "LatLon",
                vec![field("latitude", 1, Type::Double), field("longitude", 2, Type::Double)],
            ),
            message(
                "LatLonAlt",
                vec![
                    field("latitude", 1, Type::Double),
                    field("longitude", 2, Type::Double),
                    field("altitude", 3, Type::Double),
                ],
            ),
            message("Geometry", vec![field("wkb", 1, Type::Bytes)]),
        ],
        enum_type: vec![
            enumeration(
                "ProcessingLevel",
                "PROCESSING_LEVEL",
                &["L0", "L1", "L1A", "L1B", "L1C", "L2", "L2A", "L2B", "L3", "L3A", "L4", "NOT_APPLICABLE"],
            ),
            enumeration(
                "Polarization",
                "POLARIZATION",
                &["HH", "HV", "VH", "VV", "DUAL_HH", "DUAL_HV", "DUAL_VH", "DUAL_VV", "HH_HV", "VV_VH"],
            ),
            enumeration("AcquisitionMode", "ACQUISITION_MODE", &["SM", "EW", "IW", "WV", "SPOTLIGHT", "NOBS", "EXTC", "DARK", "CALIBRATION"]),
            enumeration("FlightDirection", "FLIGHT_DIRECTION", &["ASCENDING", "DESCENDING"]),
            enumeration("ObservationDirection", "OBSERVATION_DIRECTION", &["LEFT", "RIGHT"]),
            enumeration("OpendataProvider", "OPENDATA_PROVIDER", &["ASF", "COPERNICUS_DATASPACE", "UMBRA"]),
        ],
        options: Some(FileOptions {
            go_package: Some("github.com/tilebox/tilebox-go/protogen/go/datasets/v1;datasetsv1".to_string()),
            ..Default::default()
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(r#type as i32),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// Enum with an `<PREFIX>_UNSPECIFIED = 0` entry followed by `values` numbered from 1.
fn enumeration(name: &str, prefix: &str, values: &[&str]) -> EnumDescriptorProto {
    let unspecified = EnumValueDescriptorProto {
        name: Some(format!("{prefix}_UNSPECIFIED")),
        number: Some(0),
        ..Default::default()
    };
    let rest = values.iter().zip(1..).map(|(value, number)| EnumValueDescriptorProto {
        name: Some(format!("{prefix}_{value}")),
        number: Some(number),
        ..Default::default()
    });
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: std::iter::once(unspecified).chain(rest).collect(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_reflect::DescriptorPool;
    use prost_types::FileDescriptorSet;

    #[test]
    fn test_assemble_order() {
        let file = FileDescriptorProto {
            name: Some("tilebox/v1/Granule.proto".to_string()),
            ..Default::default()
        };
        let names: Vec<_> = assemble(file).iter().map(|f| f.name().to_string()).collect();
        assert_eq!(
            names,
            [DURATION_FILE, TIMESTAMP_FILE, WELL_KNOWN_TYPES_FILE, "tilebox/v1/Granule.proto"]
        );
    }

    #[test]
    fn test_google_files() {
        let set = FileDescriptorSet {
            file: vec![duration(), timestamp()],
        };
        let pool = DescriptorPool::from_file_descriptor_set(set).unwrap();
        let timestamp = pool.get_message_by_name("google.protobuf.Timestamp").unwrap();
        assert_eq!(timestamp.parent_file().name(), TIMESTAMP_FILE);
        assert!(timestamp.get_field_by_name("seconds").is_some());
        assert!(pool.get_message_by_name("google.protobuf.Duration").is_some());
    }

    #[test]
    fn test_well_known_types_links() {
        let set = FileDescriptorSet {
            file: vec![well_known_types()],
        };
        let pool = DescriptorPool::from_file_descriptor_set(set).unwrap();
        assert!(pool.get_message_by_name("datasets.v1.UUID").is_some());
        assert!(pool.get_message_by_name("datasets.v1.Geometry").is_some());
        let level = pool.get_enum_by_name("datasets.v1.ProcessingLevel").unwrap();
        assert_eq!(level.default_value().name(), "PROCESSING_LEVEL_UNSPECIFIED");
    }
}
